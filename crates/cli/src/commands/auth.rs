//! Sign-in commands.
//!
//! Each invocation is a fresh process, so the verify and resend steps rely
//! on the pending request that `login` saved.

use boighor_storefront::Storefront;
use boighor_storefront::services::OtpState;

use super::CliError;
use super::output;

pub async fn login(storefront: &Storefront, email: &str) -> Result<(), CliError> {
    storefront.otp().request_otp(email).await?;
    output::line("Enter the code with `bg-cli verify <code>`.");
    Ok(())
}

pub async fn verify(storefront: &Storefront, code: &str) -> Result<(), CliError> {
    let identity = storefront.otp().verify_otp(code).await?;
    output::line(format!("Signed in as {} ({})", identity.email, identity.role));
    Ok(())
}

pub async fn resend(storefront: &Storefront) -> Result<(), CliError> {
    storefront.otp().resend().await?;
    Ok(())
}

pub fn whoami(storefront: &Storefront) -> Result<(), CliError> {
    match storefront.session().identity() {
        Some(identity) => output::line(format!("{} ({})", identity.email, identity.role)),
        None => match storefront.otp().state() {
            OtpState::OtpRequested { email } => {
                let countdown = storefront.otp().countdown();
                if countdown.can_resend() {
                    output::line(format!("Code sent to {email}; you can ask for a new one."));
                } else {
                    output::line(format!(
                        "Code sent to {email}; resend available in {}.",
                        countdown.format_remaining()
                    ));
                }
            }
            _ => output::line("Not signed in."),
        },
    }
    Ok(())
}

pub async fn logout(storefront: &Storefront) {
    storefront.otp().logout().await;
}
