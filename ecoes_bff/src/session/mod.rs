mod codec;
mod errors;
mod types;

pub use codec::{
    decode_session, encode_session, prepare_clear_session_headers, prepare_session_headers,
    session_from_headers,
};
pub use errors::SessionError;
pub use types::{Role, Session, SessionUser, UserId};
