//! Integration and unit tests for the Buecherei backend.
//!
//! - **support**: throwaway database, test configuration and request helpers
//! - **books_api_tests**: book CRUD contract, admin gating, lending
//! - **reviews_api_tests**: review lifecycle and rating aggregation
//! - **users_api_tests**: registration, login, profile, bans, rate limiting
//! - **health_api_tests**: operational endpoints and the middleware stack
//! - **config_tests**: configuration loading and validation
//! - **db_tests**: schema and query behaviour below the HTTP layer
//! - **error_tests**: error mapping and response bodies
//! - **types_tests**: DTO validation and serialization

pub mod support;

pub mod types_tests;
pub mod users_api_tests;
