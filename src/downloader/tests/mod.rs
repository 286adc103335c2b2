use super::test_helpers::*;
use crate::types::{Event, Outcome};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
