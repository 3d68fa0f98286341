//! Domain name label encoding and pointer decompression.

mod labels;

pub use self::labels::{LabelCodec, MAX_LABEL_LEN, MAX_NAME_LEN, MAX_POINTER_HOPS};
