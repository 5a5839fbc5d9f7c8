pub mod operation_lock;
