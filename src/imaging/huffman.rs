//! Huffman table optimization for baseline JPEG.
//!
//! `jpeg-encoder` only builds image-specific tables when it writes one scan
//! per component, and the `image` crate's decoder reassembles that layout
//! with wrong colours. So the encoder writes a single interleaved scan with
//! the standard tables, and [`optimize`] re-codes that scan with tables built
//! from the image's own symbol counts (ITU T.81 Annex K.2, as libjpeg does
//! for `optimize_coding`).
//!
//! Only the entropy coding changes: every coefficient bit is copied, so the
//! decoded pixels are identical. Streams with restart intervals, several
//! scans, or a non-sequential frame type are returned unchanged.

use super::backend::ConversionError;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOF0: u8 = 0xC0;
const SOF1: u8 = 0xC1;
const DHT: u8 = 0xC4;
const SOS: u8 = 0xDA;
const DRI: u8 = 0xDD;

/// Longest code length baseline JPEG allows.
const MAX_CODE_LEN: usize = 16;

/// Slots 0-3 are DC tables, 4-7 AC tables.
const TABLE_SLOTS: usize = 8;

type Result<T> = std::result::Result<T, ConversionError>;

fn malformed(msg: impl std::fmt::Display) -> ConversionError {
    ConversionError::Encode(format!("malformed JPEG stream: {msg}"))
}

/// Re-code the entropy-coded scan of a baseline JPEG with optimal tables.
pub(crate) fn optimize(jpeg: &[u8]) -> Result<Vec<u8>> {
    let Some(stream) = Stream::parse(jpeg)? else {
        return Ok(jpeg.to_vec());
    };

    let symbols = stream.decode_symbols()?;

    let mut freq = [[0u32; 256]; TABLE_SLOTS];
    for s in &symbols {
        freq[s.slot][s.value as usize] += 1;
    }

    let mut spec: [Option<TableSpec>; TABLE_SLOTS] = Default::default();
    let mut codes: [Option<CodeTable>; TABLE_SLOTS] = Default::default();
    for slot in stream.scan.used_slots() {
        let table = TableSpec::optimal(&freq[slot]);
        codes[slot] = Some(table.code_table());
        spec[slot] = Some(table);
    }

    let mut writer = BitWriter::default();
    for s in &symbols {
        let (code, len) = codes[s.slot]
            .as_ref()
            .and_then(|t| t.get(s.value))
            .ok_or_else(|| malformed(format!("no code for symbol {:#04x}", s.value)))?;
        writer.put(code, len);
        writer.put(s.extra, s.extra_len);
    }
    let entropy = writer.finish();

    let mut out = Vec::with_capacity(jpeg.len());
    out.extend_from_slice(&[0xFF, SOI]);
    for (marker, body) in &stream.segments {
        write_segment(&mut out, *marker, body)?;
    }
    write_segment(&mut out, DHT, &dht_body(&spec))?;
    write_segment(&mut out, SOS, stream.scan_header)?;
    out.extend_from_slice(&entropy);
    out.extend_from_slice(&[0xFF, EOI]);
    Ok(out)
}

fn write_segment(out: &mut Vec<u8>, marker: u8, body: &[u8]) -> Result<()> {
    let len = u16::try_from(body.len() + 2)
        .map_err(|_| malformed(format!("segment {marker:#04x} too long")))?;
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(body);
    Ok(())
}

fn dht_body(tables: &[Option<TableSpec>; TABLE_SLOTS]) -> Vec<u8> {
    let mut body = Vec::new();
    for (slot, table) in tables.iter().enumerate() {
        if let Some(table) = table {
            let class = (slot / 4) as u8;
            let id = (slot % 4) as u8;
            body.push(class << 4 | id);
            body.extend_from_slice(&table.counts);
            body.extend_from_slice(&table.values);
        }
    }
    body
}

// =========================================================================
// Parsing
// =========================================================================

struct FrameComponent {
    id: u8,
    h: usize,
    v: usize,
}

struct Frame {
    width: usize,
    height: usize,
    components: Vec<FrameComponent>,
}

impl Frame {
    fn parse(body: &[u8]) -> Result<Self> {
        if body.len() < 6 {
            return Err(malformed("short frame header"));
        }
        let height = u16::from_be_bytes([body[1], body[2]]) as usize;
        let width = u16::from_be_bytes([body[3], body[4]]) as usize;
        let count = body[5] as usize;
        let entries = body
            .get(6..6 + count * 3)
            .ok_or_else(|| malformed("short frame header"))?;
        let components = entries
            .chunks_exact(3)
            .map(|c| FrameComponent {
                id: c[0],
                h: (c[1] >> 4) as usize,
                v: (c[1] & 0x0F) as usize,
            })
            .collect::<Vec<_>>();
        if width == 0
            || height == 0
            || components.is_empty()
            || components.iter().any(|c| !(1..=4).contains(&c.h) || !(1..=4).contains(&c.v))
        {
            return Err(malformed("invalid frame header"));
        }
        Ok(Self {
            width,
            height,
            components,
        })
    }

    fn max_sampling(&self) -> (usize, usize) {
        self.components
            .iter()
            .fold((1, 1), |(h, v), c| (h.max(c.h), v.max(c.v)))
    }
}

struct ScanComponent {
    /// Index into [`Frame::components`].
    frame_index: usize,
    dc_slot: usize,
    ac_slot: usize,
}

struct Scan {
    components: Vec<ScanComponent>,
}

impl Scan {
    /// `None` when the scan is not a full baseline scan (progressive band).
    fn parse(body: &[u8], frame: &Frame) -> Result<Option<Self>> {
        let count = *body.first().ok_or_else(|| malformed("empty scan header"))? as usize;
        if body.len() != 1 + count * 2 + 3 {
            return Err(malformed("scan header length mismatch"));
        }
        let tail = &body[1 + count * 2..];
        if tail != [0, 63, 0] {
            return Ok(None);
        }
        let components = body[1..1 + count * 2]
            .chunks_exact(2)
            .map(|c| {
                let frame_index = frame
                    .components
                    .iter()
                    .position(|fc| fc.id == c[0])
                    .ok_or_else(|| malformed(format!("scan names unknown component {}", c[0])))?;
                let (dc, ac) = ((c[1] >> 4) as usize, (c[1] & 0x0F) as usize);
                if dc > 3 || ac > 3 {
                    return Err(malformed("Huffman table id out of range"));
                }
                Ok(ScanComponent {
                    frame_index,
                    dc_slot: dc,
                    ac_slot: 4 + ac,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Self { components }))
    }

    fn used_slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .components
            .iter()
            .flat_map(|c| [c.dc_slot, c.ac_slot])
            .collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    }
}

/// A baseline JPEG split into the parts the optimizer rewrites.
struct Stream<'a> {
    /// Marker segments before the scan, minus DHT.
    segments: Vec<(u8, &'a [u8])>,
    decode_tables: [Option<DecodeTable>; TABLE_SLOTS],
    frame: Frame,
    scan: Scan,
    scan_header: &'a [u8],
    /// Entropy-coded data with byte stuffing still in place.
    entropy: &'a [u8],
}

impl<'a> Stream<'a> {
    /// `None` when the stream has a shape this pass leaves alone.
    fn parse(jpeg: &'a [u8]) -> Result<Option<Self>> {
        if !jpeg.starts_with(&[0xFF, SOI]) {
            return Err(malformed("missing SOI marker"));
        }

        let mut pos = 2;
        let mut segments = Vec::new();
        let mut decode_tables: [Option<DecodeTable>; TABLE_SLOTS] = Default::default();
        let mut frame = None;

        loop {
            let header = jpeg
                .get(pos..pos + 4)
                .ok_or_else(|| malformed("truncated before scan"))?;
            if header[0] != 0xFF {
                return Err(malformed(format!("expected marker at offset {pos}")));
            }
            let marker = header[1];
            if marker == 0xFF {
                // fill byte
                pos += 1;
                continue;
            }
            let len = u16::from_be_bytes([header[2], header[3]]) as usize;
            let body = jpeg
                .get(pos + 4..pos + 2 + len)
                .filter(|_| len >= 2)
                .ok_or_else(|| malformed(format!("bad length for segment {marker:#04x}")))?;
            pos += 2 + len;

            match marker {
                DHT => parse_dht(body, &mut decode_tables)?,
                SOF0 | SOF1 => {
                    frame = Some(Frame::parse(body)?);
                    segments.push((marker, body));
                }
                0xC2 | 0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => return Ok(None),
                DRI => {
                    if body.len() >= 2 && u16::from_be_bytes([body[0], body[1]]) != 0 {
                        return Ok(None);
                    }
                    segments.push((marker, body));
                }
                SOS => {
                    let frame = frame.ok_or_else(|| malformed("scan before frame header"))?;
                    let Some(scan) = Scan::parse(body, &frame)? else {
                        return Ok(None);
                    };
                    let end = entropy_end(jpeg, pos);
                    if end == jpeg.len() {
                        return Err(malformed("missing EOI marker"));
                    }
                    if jpeg.get(end..) != Some(&[0xFF, EOI][..]) {
                        // more than one scan
                        return Ok(None);
                    }
                    return Ok(Some(Self {
                        segments,
                        decode_tables,
                        frame,
                        scan,
                        scan_header: body,
                        entropy: &jpeg[pos..end],
                    }));
                }
                _ => segments.push((marker, body)),
            }
        }
    }

    /// Decode every Huffman symbol of the scan, in stream order.
    fn decode_symbols(&self) -> Result<Vec<Symbol>> {
        let unstuffed = unstuff(self.entropy);
        let mut reader = BitReader::new(&unstuffed);
        let mut symbols = Vec::new();

        let table = |slot: usize| {
            self.decode_tables[slot]
                .as_ref()
                .ok_or_else(|| malformed(format!("scan uses undefined Huffman table {slot}")))
        };

        let (h_max, v_max) = self.frame.max_sampling();
        if let [only] = self.scan.components.as_slice() {
            // Non-interleaved: one block per MCU over the component's own grid.
            let fc = &self.frame.components[only.frame_index];
            let cols = (self.frame.width * fc.h).div_ceil(h_max).div_ceil(8);
            let rows = (self.frame.height * fc.v).div_ceil(v_max).div_ceil(8);
            let (dc, ac) = (table(only.dc_slot)?, table(only.ac_slot)?);
            for _ in 0..cols * rows {
                decode_block(&mut reader, (only.dc_slot, dc), (only.ac_slot, ac), &mut symbols)?;
            }
        } else {
            let mcus_x = self.frame.width.div_ceil(8 * h_max);
            let mcus_y = self.frame.height.div_ceil(8 * v_max);
            for _ in 0..mcus_x * mcus_y {
                for sc in &self.scan.components {
                    let fc = &self.frame.components[sc.frame_index];
                    let (dc, ac) = (table(sc.dc_slot)?, table(sc.ac_slot)?);
                    for _ in 0..fc.h * fc.v {
                        decode_block(&mut reader, (sc.dc_slot, dc), (sc.ac_slot, ac), &mut symbols)?;
                    }
                }
            }
        }
        Ok(symbols)
    }
}

fn parse_dht(mut body: &[u8], tables: &mut [Option<DecodeTable>; TABLE_SLOTS]) -> Result<()> {
    while let Some((&tc_th, rest)) = body.split_first() {
        let (class, id) = ((tc_th >> 4) as usize, (tc_th & 0x0F) as usize);
        if class > 1 || id > 3 {
            return Err(malformed(format!("bad Huffman table id {tc_th:#04x}")));
        }
        let counts: [u8; MAX_CODE_LEN] = rest
            .get(..MAX_CODE_LEN)
            .and_then(|c| c.try_into().ok())
            .ok_or_else(|| malformed("short DHT segment"))?;
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        let values = rest
            .get(MAX_CODE_LEN..MAX_CODE_LEN + total)
            .ok_or_else(|| malformed("short DHT segment"))?;
        tables[class * 4 + id] = Some(DecodeTable::new(&counts, values.to_vec()));
        body = &rest[MAX_CODE_LEN + total..];
    }
    Ok(())
}

/// Offset of the first marker after entropy-coded data starting at `start`.
fn entropy_end(jpeg: &[u8], start: usize) -> usize {
    let mut i = start;
    while i + 1 < jpeg.len() {
        if jpeg[i] == 0xFF && jpeg[i + 1] != 0x00 {
            return i;
        }
        i += 1;
    }
    jpeg.len()
}

fn unstuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        out.push(data[i]);
        if data[i] == 0xFF && data.get(i + 1) == Some(&0x00) {
            i += 1;
        }
        i += 1;
    }
    out
}

// =========================================================================
// Entropy decoding
// =========================================================================

/// One Huffman-coded symbol and the raw magnitude bits that follow it.
struct Symbol {
    slot: usize,
    value: u8,
    extra: u16,
    extra_len: u8,
}

fn decode_block(
    reader: &mut BitReader,
    (dc_slot, dc): (usize, &DecodeTable),
    (ac_slot, ac): (usize, &DecodeTable),
    symbols: &mut Vec<Symbol>,
) -> Result<()> {
    let size = dc.decode(reader)?;
    if size > 11 {
        return Err(malformed(format!("DC difference category {size}")));
    }
    symbols.push(Symbol {
        slot: dc_slot,
        value: size,
        extra: reader.bits(size)?,
        extra_len: size,
    });

    let mut k = 1;
    while k < 64 {
        let rs = ac.decode(reader)?;
        let (run, size) = ((rs >> 4) as usize, rs & 0x0F);
        symbols.push(Symbol {
            slot: ac_slot,
            value: rs,
            extra: reader.bits(size)?,
            extra_len: size,
        });
        match (run, size) {
            (0, 0) => break,
            (15, 0) => k += 16,
            _ => k += run + 1,
        }
    }
    if k > 64 {
        return Err(malformed("AC coefficients run past the block"));
    }
    Ok(())
}

/// Canonical decoding table (T.81 F.2.2.3).
struct DecodeTable {
    min_code: [i32; MAX_CODE_LEN + 1],
    max_code: [i32; MAX_CODE_LEN + 1],
    val_ptr: [usize; MAX_CODE_LEN + 1],
    values: Vec<u8>,
}

impl DecodeTable {
    fn new(counts: &[u8; MAX_CODE_LEN], values: Vec<u8>) -> Self {
        let mut table = Self {
            min_code: [0; MAX_CODE_LEN + 1],
            max_code: [-1; MAX_CODE_LEN + 1],
            val_ptr: [0; MAX_CODE_LEN + 1],
            values,
        };
        let mut code = 0i32;
        let mut k = 0;
        for len in 1..=MAX_CODE_LEN {
            let n = counts[len - 1] as usize;
            table.val_ptr[len] = k;
            table.min_code[len] = code;
            if n > 0 {
                table.max_code[len] = code + n as i32 - 1;
            }
            code = (code + n as i32) << 1;
            k += n;
        }
        table
    }

    fn decode(&self, reader: &mut BitReader) -> Result<u8> {
        let mut code = 0i32;
        for len in 1..=MAX_CODE_LEN {
            code = (code << 1) | reader.bit()? as i32;
            if code <= self.max_code[len] {
                let index = self.val_ptr[len] + (code - self.min_code[len]) as usize;
                return self
                    .values
                    .get(index)
                    .copied()
                    .ok_or_else(|| malformed("Huffman code outside table"));
            }
        }
        Err(malformed("invalid Huffman code"))
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    /// Position in bits.
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bit(&mut self) -> Result<u16> {
        let byte = self
            .data
            .get(self.pos / 8)
            .ok_or_else(|| malformed("entropy-coded data ends early"))?;
        let bit = (byte >> (7 - self.pos % 8)) & 1;
        self.pos += 1;
        Ok(bit as u16)
    }

    fn bits(&mut self, n: u8) -> Result<u16> {
        let mut v = 0;
        for _ in 0..n {
            v = (v << 1) | self.bit()?;
        }
        Ok(v)
    }
}

// =========================================================================
// Table construction and encoding
// =========================================================================

/// A table as stored in a DHT segment: code counts per length, then symbols
/// in code order.
#[derive(Debug)]
struct TableSpec {
    counts: [u8; MAX_CODE_LEN],
    values: Vec<u8>,
}

impl TableSpec {
    /// Build the length-limited optimal table for `freq` (T.81 K.2).
    ///
    /// A pseudo-symbol with frequency 1 takes part in the construction and is
    /// dropped at the end, so no real symbol gets the all-ones code.
    fn optimal(freq: &[u32; 256]) -> Self {
        const RESERVED: usize = 256;
        let mut freq: Vec<u64> = freq.iter().map(|&f| u64::from(f)).collect();
        freq.push(1);

        let mut code_size = vec![0usize; RESERVED + 1];
        let mut others: Vec<Option<usize>> = vec![None; RESERVED + 1];

        // K.1: repeatedly merge the two least frequent trees, preferring the
        // higher symbol on ties so the pseudo-symbol ends up deepest.
        while let Some(c1) = least_frequent(&freq, None) {
            let Some(c2) = least_frequent(&freq, Some(c1)) else {
                break;
            };
            freq[c1] += freq[c2];
            freq[c2] = 0;

            let mut c = c1;
            code_size[c] += 1;
            while let Some(next) = others[c] {
                c = next;
                code_size[c] += 1;
            }
            others[c] = Some(c2);

            let mut c = c2;
            code_size[c] += 1;
            while let Some(next) = others[c] {
                c = next;
                code_size[c] += 1;
            }
        }

        // K.2: count codes per length.
        let longest = code_size.iter().copied().max().unwrap_or(0);
        let mut bits = vec![0u32; longest.max(MAX_CODE_LEN) + 1];
        for &size in &code_size {
            if size > 0 {
                bits[size] += 1;
            }
        }

        // K.3: fold lengths above 16 back into the tree.
        let mut i = bits.len() - 1;
        while i > MAX_CODE_LEN {
            while bits[i] > 0 {
                let mut j = i - 2;
                while bits[j] == 0 {
                    j -= 1;
                }
                bits[i] -= 2;
                bits[i - 1] += 1;
                bits[j + 1] += 2;
                bits[j] -= 1;
            }
            i -= 1;
        }
        // Remove the pseudo-symbol's code from the longest length.
        if let Some(len) = (1..=MAX_CODE_LEN).rev().find(|&len| bits[len] > 0) {
            bits[len] -= 1;
        }

        // K.4: symbols ordered by code size, then by value.
        let mut values: Vec<u8> = (0..=255u8)
            .filter(|&v| code_size[v as usize] > 0)
            .collect();
        values.sort_by_key(|&v| code_size[v as usize]);

        let mut counts = [0u8; MAX_CODE_LEN];
        for (len, count) in counts.iter_mut().enumerate() {
            *count = bits[len + 1] as u8;
        }
        Self { counts, values }
    }

    /// Canonical code assignment (T.81 C.2).
    fn code_table(&self) -> CodeTable {
        let mut codes = [None; 256];
        let mut code = 0u16;
        let mut values = self.values.iter();
        for (i, &count) in self.counts.iter().enumerate() {
            for _ in 0..count {
                if let Some(&v) = values.next() {
                    codes[v as usize] = Some((code, i as u8 + 1));
                }
                code = code.wrapping_add(1);
            }
            code = code.wrapping_shl(1);
        }
        CodeTable { codes }
    }
}

fn least_frequent(freq: &[u64], skip: Option<usize>) -> Option<usize> {
    freq.iter()
        .enumerate()
        .filter(|&(i, &f)| f > 0 && Some(i) != skip)
        .min_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(i, _)| i)
}

/// Symbol → (code, length) lookup.
struct CodeTable {
    codes: [Option<(u16, u8)>; 256],
}

impl CodeTable {
    fn get(&self, value: u8) -> Option<(u16, u8)> {
        self.codes[value as usize]
    }
}

/// MSB-first bit sink with JPEG byte stuffing.
#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    len: u32,
}

impl BitWriter {
    fn put(&mut self, bits: u16, len: u8) {
        if len == 0 {
            return;
        }
        let len = u32::from(len);
        self.acc = (self.acc << len) | (u32::from(bits) & ((1 << len) - 1));
        self.len += len;
        while self.len >= 8 {
            self.len -= 8;
            let byte = (self.acc >> self.len) as u8;
            self.out.push(byte);
            if byte == 0xFF {
                self.out.push(0x00);
            }
        }
        self.acc &= (1 << self.len) - 1;
    }

    /// Pad the last byte with 1-bits.
    fn finish(mut self) -> Vec<u8> {
        if self.len > 0 {
            let pad = 8 - self.len;
            self.put((1 << pad) - 1, pad as u8);
        }
        self.out
    }
}
