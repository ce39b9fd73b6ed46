// Lives in its own test binary: filling the table affects every later registration.

use schema::{Flag, SchemaError, MAX_FLAGS};

#[test]
fn table_fills_up() {
    let mut last = Ok(Flag::NO_COMPRESS);
    for i in 0..MAX_FLAGS {
        last = Flag::register(&format!("fill{i}"));
        if last.is_err() {
            break;
        }
    }
    assert_eq!(last, Err(SchemaError::FlagTableFull { max: MAX_FLAGS }));
}
