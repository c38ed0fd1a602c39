/// Router Module Index
///
/// Routes are split by access level so authentication is applied as a router layer,
/// not remembered per handler. Object-level rules (ownership, draft visibility)
/// are still enforced inside the handlers.

/// Routes open to anonymous callers. Handlers receive a `Requester` that may be anonymous.
pub mod public;

/// Routes wrapped in the `AuthUser` middleware. Anonymous callers are rejected with 401.
pub mod authenticated;
