pub mod delimited_reader;
pub mod mem;
pub mod random;
pub mod test_utils;
