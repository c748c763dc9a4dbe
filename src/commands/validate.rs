use crate::output::UserOutput;
use container_warden::Parser as ConfigParser;
use std::path::PathBuf;

pub fn run_validate(
    config_path: Option<PathBuf>,
    token_override: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let parser = ConfigParser::new();
    let config_path = match config_path {
        Some(path) => path,
        None => match parser.find_config_file() {
            Ok(path) => path,
            Err(e) => {
                out.error("Error: No configuration file found");
                out.warning(&format!(
                    "\nSearched in: {}",
                    std::env::current_dir()?.display()
                ));
                return Err(e.into());
            }
        },
    };

    out.status(&format!("Validating {}...", config_path.display()));

    let config = match parser.load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            out.error("Configuration failed to load");
            return Err(e.into());
        }
    };

    config.validate()?;

    out.success("Configuration is valid\n");
    out.status(&format!("Image:          {}", config.image_name));
    out.status(&format!(
        "Limits:         {} cores, {} memory",
        config.cpu_limit, config.memory_limit
    ));
    out.status(&format!("Command prefix: {}", config.command_prefix));
    out.status(&format!("Admins:         {}", config.admin_ids.len()));
    out.status(&format!(
        "Server:         {}",
        config.guild_id.as_deref().unwrap_or("any")
    ));
    out.status(&format!("Database:       {}", config.database_path.display()));
    out.status(&format!("Create cooldown: {:?}", config.create_cooldown));
    out.status(&format!(
        "Orphan policy:  {}",
        format!("{:?}", config.orphan_policy).to_lowercase()
    ));

    if config.token().is_none() && !token_override {
        out.blank();
        out.warning("Warning: no discord_token configured; `warden serve` will refuse to start");
    }

    Ok(())
}
