//! End-to-end tests over the in-memory metadata store and a temp storage tree.

mod helpers;

mod concurrency_test;
mod lifecycle_test;
mod share_test;
mod sweep_test;
