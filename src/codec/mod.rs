mod raw;
pub(crate) use raw::Decoder as RawDecoder;
