pub fn to_db_ms(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub fn from_db_ms(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
