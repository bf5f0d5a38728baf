pub mod recognition_pool;
