#![no_main]
use std::cell::RefCell;
use std::io::{self, Read};

use arbitrary::{Arbitrary, Unstructured};
use iontext::{IonType, Reader, ReaderOptions, TextReader};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

const HEADER: usize = 5; // 1 flag + 4-byte seed

thread_local! {
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

/// Separators the tokenizer has to skip, including both comment forms.
static SKIP_TABLE: &[&[u8]] = &[
    b" ",
    b"\t",
    b"\n",
    b"\r\n",
    b"// line comment\n",
    b"/* block */",
    b"/**/",
];

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8 & 0x3F);
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let mut prefix = HEADER;
        while prefix < size {
            let limit = max_size - prefix;

            prefix += append_skip(&mut data[prefix..], limit);
            prefix += append_value(&mut data[prefix..], size, max_size - prefix);
        }
        prefix
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

fn append_skip(buf: &mut [u8], limit: usize) -> usize {
    with_rng(|rng| {
        if limit == 0 {
            return 0;
        }
        let n = rng.random_range(1..=limit.min(4));
        let mut written = 0;
        for _ in 0..n {
            let w = SKIP_TABLE[rng.random_range(0..SKIP_TABLE.len())];
            if written + w.len() > limit {
                break;
            }
            buf[written..written + w.len()].copy_from_slice(w);
            written += w.len();
        }
        written
    })
}

fn append_value(data: &mut [u8], size: usize, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }
    let value = loop {
        let s = with_rng(|rng| rng.random_range(size / 2..=size * 2).min(limit));
        let bytes: Vec<u8> = with_rng(|rng| (0..s).map(|_| rng.random::<u8>()).collect());
        if let Ok(value) = IonText::arbitrary(&mut Unstructured::new(&bytes)) {
            break value;
        }
    };

    let len = value.0.len().min(limit);
    data[..len].copy_from_slice(&value.0.as_bytes()[..len]);
    len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

/// A syntactically plausible Ion value, rendered as text.
#[derive(Debug)]
struct IonText(String);

impl<'a> Arbitrary<'a> for IonText {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let mut text = String::new();
        for _ in 0..u.choose_index(3)? {
            text.push_str(&symbol(u)?);
            text.push_str("::");
        }
        let rendered = match u.choose_index(16)? {
            0 => "null".to_owned(),
            1 => format!("null.{}", u.choose(&["int", "string", "struct", "list", "bogus"])?),
            2 => u.choose(&["true", "false", "nan", "+inf", "-inf"])?.to_string(),
            3 => i64::arbitrary(u)?.to_string(),
            4 => format!("0x{:X}", u64::arbitrary(u)?),
            5 => format!("-0b{:b}", u32::arbitrary(u)?),
            6 => format!("{:e}", f64::arbitrary(u)?),
            7 => format!("{}.{}d{}", u16::arbitrary(u)?, u8::arbitrary(u)?, i8::arbitrary(u)?),
            8 => "2024-01-02T03:04:05.678Z".to_owned(),
            9 => format!("{:?}", String::arbitrary(u)?),
            10 => format!("'''{}''' '''{}'''", ascii(u)?, ascii(u)?),
            11 => symbol(u)?,
            12 => u.choose(&["{{ aGVsbG8= }}", "{{ \"clob\" }}", "{{ '''a''' '''b''' }}"])?.to_string(),
            13 => format!("[{}]", children(u, ", ")?),
            14 => format!("({})", children(u, " ")?),
            _ => {
                let fields: Vec<(String, IonText)> = u.arbitrary()?;
                let body: Vec<String> = fields
                    .into_iter()
                    .map(|(k, v)| format!("{k:?}: {}", v.0))
                    .collect();
                format!("{{{}}}", body.join(", "))
            }
        };
        text.push_str(&rendered);
        Ok(IonText(text))
    }
}

fn children(u: &mut Unstructured<'_>, separator: &str) -> arbitrary::Result<String> {
    let elems: Vec<IonText> = u.arbitrary()?;
    Ok(elems.into_iter().map(|v| v.0).collect::<Vec<_>>().join(separator))
}

fn ascii(u: &mut Unstructured<'_>) -> arbitrary::Result<String> {
    let s = String::arbitrary(u)?;
    Ok(s.chars().filter(|c| c.is_ascii_alphanumeric() || *c == ' ').collect())
}

fn symbol(u: &mut Unstructured<'_>) -> arbitrary::Result<String> {
    let s = ascii(u)?.replace(' ', "_");
    Ok(if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
        format!("'{s}'")
    } else {
        s
    })
}

/// Splits the source into reads sized by a fixed seed, so lookahead crosses
/// refill boundaries.
struct Chunked<'a> {
    data: &'a [u8],
    seed: u64,
}

impl Read for Chunked<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.is_empty() || buf.is_empty() {
            return Ok(0);
        }
        let size = ((self.seed as usize) % self.data.len() + 1).min(buf.len());
        self.seed = self.seed.rotate_left(7) ^ 0x9E37_79B9;
        buf[..size].copy_from_slice(&self.data[..size]);
        self.data = &self.data[size..];
        Ok(size)
    }
}

/// Visits every value, exercising each accessor that matches its type.
fn drain(r: &mut impl Reader, step_out_early: bool) {
    let mut visited = 0usize;
    while r.next() {
        visited += 1;
        let _ = r.annotations();
        let _ = r.field_name();
        match r.ion_type() {
            Some(IonType::Bool) => {
                let _ = r.bool_value();
            }
            Some(IonType::Int) => {
                let _ = r.int_value();
                let _ = r.int64_value();
                let _ = r.big_int_value();
            }
            Some(IonType::Float) => {
                let _ = r.float_value();
            }
            Some(IonType::Decimal) => {
                let _ = r.decimal_value();
            }
            Some(IonType::Timestamp) => {
                let _ = r.timestamp_text();
            }
            Some(IonType::String | IonType::Symbol) => {
                let _ = r.string_value();
            }
            Some(IonType::Blob | IonType::Clob) => {
                let _ = r.lob_value();
            }
            Some(IonType::List | IonType::Sexp | IonType::Struct) => {
                if r.step_in().is_ok() {
                    drain(r, step_out_early);
                    let _ = r.step_out();
                }
            }
            Some(IonType::Null) | None => {}
        }
        if step_out_early && r.depth() > 0 && visited > 2 {
            return;
        }
    }
}

fn reader(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let split_seed = u64::from(u32::from_le_bytes([data[1], data[2], data[3], data[4]]));
    let data = &data[HEADER..];

    let options = ReaderOptions {
        max_container_depth: (flags & 1 != 0).then_some(usize::from(flags >> 4) + 1),
    };
    let mut r = TextReader::with_options(
        Chunked {
            data,
            seed: split_seed,
        },
        options,
    );
    drain(&mut r, flags & 2 != 0);

    if let Some(err) = r.err() {
        assert!(err.is_fatal(), "non-fatal error latched: {err}");
        assert!(!r.next());
    }
}

fuzz_target!(|data: &[u8]| reader(data));
