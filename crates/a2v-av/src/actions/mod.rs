//! Media processing actions.

mod voice;

pub use voice::{encode_voice, voice_encode_args};
