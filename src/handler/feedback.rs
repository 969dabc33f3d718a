use anyhow::{anyhow, bail};
use deadpool_postgres::Pool;

use super::{Context, FeedbackCommand};
use crate::db::export::write_feedback_workbook;
use crate::db::Feedback;
use crate::Identity;

fn require_identity(ctx: &Context) -> anyhow::Result<Identity> {
    ctx.config
        .identity()
        .ok_or_else(|| anyhow!("please log in to use feedback (set user_id in config.toml or DOCSIGHT_USER_ID)"))
}

fn is_admin(ctx: &Context, who: &Identity) -> bool {
    let admin = ctx.config.admin_email.trim();
    !admin.is_empty() && who.email.eq_ignore_ascii_case(admin)
}

fn require_admin(ctx: &Context) -> anyhow::Result<Identity> {
    let who = require_identity(ctx)?;
    if !is_admin(ctx, &who) {
        bail!("this command is limited to the administrator");
    }
    Ok(who)
}

pub async fn handle(ctx: &Context, pool: &Pool, cmd: FeedbackCommand) -> anyhow::Result<()> {
    let who = require_identity(ctx)?;
    Feedback::ensure_table(pool).await?;

    match cmd {
        FeedbackCommand::Add { category, comment } => {
            let entry = Feedback::create(pool, &who, category, &comment).await?;
            println!("Thank you for your feedback! It was recorded as #{}.", entry.id);
        }
        FeedbackCommand::List { all } => {
            let scope = if all {
                require_admin(ctx)?;
                None
            } else {
                Some(who.user_id.as_str())
            };
            let entries = Feedback::list(pool, scope).await?;
            if entries.is_empty() {
                println!("No feedback yet");
            }
            for entry in &entries {
                print_entry(entry, all);
            }
        }
        FeedbackCommand::Respond { id, status, response } => {
            require_admin(ctx)?;
            match Feedback::respond(pool, id, status, &response).await? {
                Some(entry) => println!("Feedback #{} is now {}", entry.id, entry.status),
                None => bail!("no feedback with id {}", id),
            }
        }
        FeedbackCommand::Remove { id } => {
            require_admin(ctx)?;
            if !Feedback::delete(pool, id).await? {
                bail!("no feedback with id {}", id);
            }
            println!("Deleted feedback #{}", id);
        }
        FeedbackCommand::Export { path } => {
            require_admin(ctx)?;
            let entries = Feedback::list(pool, None).await?;
            write_feedback_workbook(&entries, &path)?;
            println!("Exported {} entries to {}", entries.len(), path.display());
        }
    }
    Ok(())
}

fn print_entry(entry: &Feedback, with_user: bool) {
    println!("\n#{} {} - {}", entry.id, entry.category, entry.status);
    if with_user {
        println!("From: {} ({})", entry.username, entry.user_email);
    }
    println!("Submitted on {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!("{}", entry.comment);
    if !entry.admin_response.trim().is_empty() {
        println!("Admin response: {}", entry.admin_response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn ctx(user_id: &str, email: &str, admin: &str) -> Context {
        let mut ctx = Context::for_tests(None);
        ctx.config = Config {
            user_id: user_id.into(),
            user_email: email.into(),
            admin_email: admin.into(),
            ..Config::default()
        };
        ctx
    }

    #[test]
    fn test_identity_gate() {
        assert!(require_identity(&ctx("", "", "")).is_err());
        assert!(require_identity(&ctx("u-1", "a@b.c", "")).is_ok());
    }

    #[test]
    fn test_admin_gate() {
        assert!(require_admin(&ctx("u-1", "Boss@Example.com", "boss@example.com")).is_ok());
        assert!(require_admin(&ctx("u-2", "someone@example.com", "boss@example.com")).is_err());
        assert!(require_admin(&ctx("u-1", "", "")).is_err());
    }
}
