//! Contract tests for async_runtime
