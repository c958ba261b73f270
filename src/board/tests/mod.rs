//! Board test suites: perft tables, attack reference scans, round
//! trips, draw detection and property-based checks.

mod attacks;
mod draw;
mod make_unmake;
mod proptest;
