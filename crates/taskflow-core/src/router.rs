//! Which screen a front end should show.

use crate::session::{SessionState, Termination};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Home,
    Register,
    Login,
    Dashboard,
}

#[derive(Debug, Default)]
pub struct ViewRouter {
    current: View,
}

impl ViewRouter {
    #[must_use]
    pub const fn current(&self) -> View {
        self.current
    }

    /// Go to `view`. The dashboard needs a session; without one this lands on
    /// the login view instead.
    pub fn navigate(&mut self, view: View, session: &SessionState) -> View {
        self.current = match view {
            View::Dashboard if !session.is_authenticated() => View::Login,
            other => other,
        };
        self.current
    }

    pub fn on_session_ended(&mut self, reason: Termination) -> View {
        self.current = match reason {
            Termination::UserLogout => View::Home,
            Termination::Expired => View::Login,
        };
        self.current
    }
}
