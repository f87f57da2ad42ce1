//! Integration tests for the page context registry

mod dispatch_order;
mod readiness;
mod test_utils;
