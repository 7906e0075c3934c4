use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    sitemirror::logging::init().context("init logging")?;

    let cli = sitemirror::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        sitemirror::cli::Command::Clone(args) => {
            let config = sitemirror::clone::CloneConfig {
                urls: args.urls,
                user_agent: args.user_agent,
                proxy: args.proxy,
                cookies: args.cookies,
                project_id: args.project_id,
                max_folder_size: (args.max_folder_size > 0).then_some(args.max_folder_size),
                out_dir: args.out,
            };

            let report = sitemirror::clone::clone_all(&config).await.context("clone")?;
            for path in &report.project_paths {
                println!("{}", path.display());
            }
            if report.project_paths.is_empty() {
                anyhow::bail!("all clone targets failed");
            }

            if args.serve {
                let Some(project) = report.first_project() else {
                    anyhow::bail!("no project to serve");
                };
                sitemirror::serve::run(project, args.redirect)
                    .await
                    .context("serve")?;
            }
        }
        sitemirror::cli::Command::Serve(args) => {
            let dirs = sitemirror::project::ProjectDirs::open(&args.project)
                .context("open project")?;
            sitemirror::serve::run(dirs.root(), args.redirect)
                .await
                .context("serve")?;
        }
    }

    Ok(())
}
