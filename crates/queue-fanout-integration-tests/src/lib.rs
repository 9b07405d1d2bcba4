//! Integration tests for queue-fanout live under `tests/`.
