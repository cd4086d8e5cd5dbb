pub mod tracking_worker;
