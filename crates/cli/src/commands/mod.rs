pub mod backfill;
pub mod migrate;
