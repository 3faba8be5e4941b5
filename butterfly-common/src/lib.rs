//! Common utilities for the butterfly-osm toolkit

pub mod error;

pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use crate::Error;

    #[test]
    fn unclassified_is_reexported() {
        let result: crate::Result<()> = Err(Error::Unclassified);
        assert!(result.is_err());
    }
}
