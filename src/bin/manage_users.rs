use clap::{Parser, Subcommand};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;

use scaleup_academy::{
    db::create_orm_conn,
    entity::{
        AuthUsers, Profiles,
        auth_users::Column as AuthUserCol,
        profiles::Column as ProfileCol,
    },
    models::Role,
    services::{auth_service::create_identity, user_service::promote_identity},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage platform users directly in the database")]
struct Args {
    /// Database to operate on; falls back to DATABASE_URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List profiles, newest first
    List {
        /// Only show profiles with this role
        #[arg(short, long)]
        role: Option<Role>,
    },
    /// Create a confirmed identity with its profile
    Create {
        email: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long, default_value = "student")]
        role: Role,

        #[arg(long)]
        full_name: Option<String>,
    },
    /// Delete an identity and its profile
    Delete { email: String },
    /// Promote an existing identity to admin
    GrantAdmin { email: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let orm = create_orm_conn(&args.database_url).await?;

    match args.command {
        Command::List { role } => {
            let mut finder = Profiles::find().order_by_desc(ProfileCol::CreatedAt);
            if let Some(role) = role {
                finder = finder.filter(ProfileCol::Role.eq(role.as_str()));
            }
            for profile in finder.all(&orm).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    profile.id,
                    profile.email,
                    profile.role,
                    profile.full_name.unwrap_or_default()
                );
            }
        }
        Command::Create {
            email,
            password,
            role,
            full_name,
        } => {
            let metadata = match full_name {
                Some(name) => json!({ "full_name": name }),
                None => json!({}),
            };
            let (identity, profile) = create_identity(&orm, &email, &password, metadata, true, role)
                .await?;
            println!("Created {} ({}) as {}", identity.email, identity.id, profile.role);
        }
        Command::Delete { email } => {
            let result = AuthUsers::delete_many()
                .filter(AuthUserCol::Email.eq(email.trim().to_ascii_lowercase()))
                .exec(&orm)
                .await?;
            if result.rows_affected == 0 {
                anyhow::bail!("No user with email {email}");
            }
            println!("Deleted {email}");
        }
        Command::GrantAdmin { email } => {
            let (profile, created) = promote_identity(&orm, &email)
                .await?;
            let note = if created { " (profile created)" } else { "" };
            println!("{} is now admin{note}", profile.email);
        }
    }

    Ok(())
}
