/// The core of the renderer: programs of bytecode functions and a virtual
/// machine to run them.
mod bytes;
mod interpret;
mod program;
mod renderer;
mod runnable;
mod state;
mod validate;

pub use interpret::Interpreter;
pub use program::{Program, FORMAT_VERSION};
pub use renderer::{Renderer, RendererBuilder};
pub use runnable::Runnable;
pub use state::State;
