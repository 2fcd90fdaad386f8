//! End-to-end tests for the Kate HTTP surface live in `tests/`.
