// FallWatch: External Collaborators
//
// The engine talks to the host application only through these traits.

pub mod alert;
pub mod foreground;
pub mod outbound;
pub mod replay;
pub mod sensor;
