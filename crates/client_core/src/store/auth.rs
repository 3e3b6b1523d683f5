use crate::transport::ApiToken;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub api_token: Option<ApiToken>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    ReceiveApiToken(ApiToken),
    ClearApiToken,
}

pub fn reduce(mut state: AuthState, action: AuthAction) -> AuthState {
    match action {
        AuthAction::ReceiveApiToken(token) => state.api_token = Some(token),
        AuthAction::ClearApiToken => state.api_token = None,
    }
    state
}

pub mod selectors {
    use crate::{store::AppState, transport::ApiToken};

    pub fn get_api_token(state: &AppState) -> Option<&ApiToken> {
        state.auth.api_token.as_ref()
    }

    pub fn get_is_authenticated(state: &AppState) -> bool {
        state.auth.api_token.is_some()
    }
}
