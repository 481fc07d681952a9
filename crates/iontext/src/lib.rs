//! A pull-based reader for the Ion text format.
//!
//! Ion text is a superset of JSON with symbols, annotations,
//! arbitrary-precision numerics, long strings, s-expressions, and lobs.
//! [`TextReader`] walks it one value at a time and decodes scalars only when
//! an accessor asks for them.
//!
//! ```rust
//! use iontext::{IonType, Reader, TextReader};
//!
//! let mut reader = TextReader::from_text("price::12.50 '''multi''' '''part'''");
//!
//! assert!(reader.next());
//! assert_eq!(reader.ion_type(), Some(IonType::Decimal));
//! assert_eq!(reader.annotations(), ["price"]);
//! assert_eq!(reader.decimal_value().unwrap().unwrap().to_string(), "1250d-2");
//!
//! assert!(reader.next());
//! assert_eq!(reader.string_value().unwrap().as_deref(), Some("multipart"));
//!
//! assert!(!reader.next());
//! assert!(reader.err().is_none());
//! ```

mod decode;
mod error;
mod ion_type;
mod options;
mod reader;

pub use decode::{Decimal, Radix};
pub use error::{Error, Result, SyntaxError};
pub use ion_type::IonType;
pub use num_bigint::BigInt;
pub use options::ReaderOptions;
pub use reader::{Reader, TextReader};
