//! Runtime introspection model for inspectable services.
//!
//! Rust has no runtime reflection, so every inspectable type publishes an
//! explicit [`TypeDescriptor`]: a dispatch table keyed by member name and
//! arity, plus named property readers used by the expression engine. Member
//! arguments arrive as text and are converted with the [`ArgKind`] policy
//! declared for each parameter.
//!
//! ```
//! use quickfix::reflect::{ArgKind, TypeDescriptor, Value};
//!
//! struct Echo;
//!
//! let descriptor = TypeDescriptor::builder::<Echo>("demo.Echo")
//!     .method("say", &[ArgKind::Str], |_echo, args| {
//!         Ok(Value::from(format!("echo: {}", args.str(0)?)))
//!     })
//!     .build();
//! assert_eq!(descriptor.name(), "demo.Echo");
//! ```

mod descriptor;
mod kind;
mod value;

pub use self::descriptor::{
    Arguments, ArgumentError, Instance, Member, MemberResult, TypeDescriptor,
    TypeDescriptorBuilder,
};
pub use self::kind::{ArgKind, CoercionError};
pub use self::value::Value;
