//! Test suites for the gateway bootstrap and request pipeline.

mod support;
mod unit;
