//! End-to-end scenario tests (SPEC_FULL.md §8), run through the full
//! `OrderExecutionService` stack against an `InMemoryStore`.

mod support;

mod scenario_cross_and_rest;
mod scenario_reservation_partial_fill;
mod scenario_self_match_skip;
