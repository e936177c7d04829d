//! Route descriptors and the parameter builder that turns their declared
//! parameters into IR parameters and a synthesized body schema.

pub mod builder;
pub mod descriptor;
pub mod path;

pub use builder::build_params;
pub use descriptor::{
    HeaderSpec, ParamDocumentation, ParamSpec, ResponseCode, ResponseSpec, RouteDescriptor,
};
