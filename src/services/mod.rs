pub mod aggregation;
pub mod budget;
pub mod cash_flow;
pub mod csv_export;
pub mod projection;
