use super::{decode, Router};
use crate::protocol::{AuthResult, AuthenticateRequest, ServerMessage};
use crate::shared::names::sanitize_nickname;
use crate::store::Account;
use crate::transport::client::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// How long a fresh connection gets to authenticate before being cut off.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Ticket verification may fetch a signing key; cap the whole thing so one
/// slow platform endpoint cannot wedge the dispatch loop for long.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

const FALLBACK_NICKNAME: &str = "Player";

impl Router {
    pub(super) async fn handle_authenticate(&self, client: &Arc<Client>, data: Value) {
        if client.is_authenticated() {
            client.send(&ServerMessage::error("already authenticated"));
            return;
        }
        let Some(request) = decode::<AuthenticateRequest>(client, data) else {
            return;
        };
        match request.method.as_str() {
            "ticket" => self.authenticate_ticket(client, request).await,
            "guest" => self.authenticate_guest(client, request).await,
            _ => {
                client.send(&ServerMessage::AuthResult(AuthResult::failure(
                    "unsupported authentication method",
                )));
            }
        }
    }

    async fn authenticate_ticket(&self, client: &Arc<Client>, request: AuthenticateRequest) {
        let Some(ticket) = request.ticket.as_deref() else {
            client.send(&ServerMessage::AuthResult(AuthResult::failure(
                "ticket is required",
            )));
            return;
        };

        let verified = tokio::time::timeout(VERIFY_TIMEOUT, self.verifier.verify(ticket)).await;
        let claims = match verified {
            Ok(Ok(claims)) => claims,
            Ok(Err(error)) => {
                tracing::warn!(client = %client.id, %error, "ticket verification failed");
                client.send(&ServerMessage::AuthResult(AuthResult::failure(
                    error.to_string(),
                )));
                return;
            }
            Err(_) => {
                client.send(&ServerMessage::AuthResult(AuthResult::failure(
                    "verification timed out",
                )));
                return;
            }
        };

        let nickname = request
            .nickname
            .as_deref()
            .and_then(sanitize_nickname)
            .unwrap_or_else(|| FALLBACK_NICKNAME.to_string());

        let account = match self.store.find_by_external_ref(&claims.player_ref).await {
            Ok(Some(account)) => {
                if let Err(error) = self.store.touch_login(&account.id).await {
                    tracing::warn!(%error, "failed to record login time");
                }
                account
            }
            Ok(None) => {
                let account = Account::external(&claims.player_ref, &nickname);
                if let Err(error) = self.store.create(&account).await {
                    tracing::error!(%error, "failed to create account");
                    client.send(&ServerMessage::AuthResult(AuthResult::failure(
                        "account creation failed",
                    )));
                    return;
                }
                account
            }
            Err(error) => {
                tracing::error!(%error, "account lookup failed");
                client.send(&ServerMessage::AuthResult(AuthResult::failure(
                    "account lookup failed",
                )));
                return;
            }
        };

        self.finish_login(client, account);
    }

    async fn authenticate_guest(&self, client: &Arc<Client>, request: AuthenticateRequest) {
        let Some(nickname) = request.nickname.as_deref().and_then(sanitize_nickname) else {
            client.send(&ServerMessage::AuthResult(AuthResult::failure(
                "nickname is required",
            )));
            return;
        };

        let account = Account::guest(&nickname);
        if let Err(error) = self.store.create(&account).await {
            tracing::error!(%error, "failed to create guest account");
            client.send(&ServerMessage::AuthResult(AuthResult::failure(
                "account creation failed",
            )));
            return;
        }

        self.finish_login(client, account);
    }

    fn finish_login(&self, client: &Arc<Client>, account: Account) {
        client.set_account(account.id.clone(), account.nickname.clone());
        tracing::info!(client = %client.id, account = %account.id, guest = account.is_guest, "client authenticated");
        client.send(&ServerMessage::AuthResult(AuthResult::success(
            account.id,
            account.nickname,
        )));
    }

    /// Arms the authentication deadline for a fresh connection. Closing
    /// the outbound queue ends the writer, which closes the socket.
    pub fn start_auth_timeout(&self, client: Arc<Client>) {
        tokio::spawn(async move {
            tokio::time::sleep(AUTH_TIMEOUT).await;
            if client.is_authenticated() {
                return;
            }
            tracing::debug!(client = %client.id, "authentication timed out");
            client.send(&ServerMessage::error("authentication timed out"));
            client.close_outbound();
        });
    }
}
