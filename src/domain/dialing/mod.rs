//! Dialing bounded context - route rules, provider definitions and dialed
//! number comparison

pub mod numerical_string;
pub mod provider;
pub mod route_rule;

pub use numerical_string::{Matcher, NumericalString};
pub use provider::{ProviderDefinition, ProviderProtocol};
pub use route_rule::{RouteOperand, RouteRule, RouteRuleConfig, RoutingTable};
