//! Constants used throughout the vitals core crate.

/// Callback URI registered with the authorization server when none is configured.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/api/auth/callback";

/// Scope requested at sign-in when none is configured.
pub const DEFAULT_SCOPE: &str = "openid patient.read patient/Observation.c";

/// Session lifetime in seconds when none is configured.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Name of the cookie carrying the browser session id.
pub const SESSION_COOKIE_NAME: &str = "vitals_session";

/// Path of the patient view the callback redirects to.
pub const PATIENT_VIEW_PATH: &str = "/patient";

/// Query parameter carrying the token in legacy URL mode.
pub const ACCESS_TOKEN_QUERY_PARAM: &str = "accessToken";

pub(crate) const USER_AGENT: &str = concat!("vitals-relay/", env!("CARGO_PKG_VERSION"));
