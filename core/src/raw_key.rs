crate::u256_struct!(RawKey);
