use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::ConnectArgs;
use crate::config::Config;
use crate::staging::Stager;
use crate::transfer::{self, ConnectionParameters, Protocol, SelectionCriteria};
use crate::{archive, intake, mail, util};

/// Arguments for `handle_download` grouped to avoid too-many-arguments lint.
#[derive(Debug, Clone)]
pub struct DownloadArgs {
    pub conn: ConnectArgs,
    pub directory: String,
    pub prefixes: Vec<String>,
    pub from_date: String,
    pub destination: String,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct UploadArgs {
    pub conn: ConnectArgs,
    pub remote_dir: String,
    pub extract_zip: bool,
    pub sources: Vec<PathBuf>,
}

fn connection_params(args: &ConnectArgs) -> Result<ConnectionParameters> {
    let protocol: Protocol = args.protocol.parse()?;
    Ok(ConnectionParameters::new(
        protocol,
        args.host.clone(),
        args.port,
        args.username.clone(),
        args.password.clone(),
    ))
}

/// 下载：筛选远端文件，打包 zip，写入暂存目录
pub fn handle_download(config: &Config, args: DownloadArgs) -> Result<PathBuf> {
    let DownloadArgs { conn, directory, prefixes, from_date, destination, output } = args;
    // validate everything local before touching the network
    let params = connection_params(&conn)?;
    let criteria = SelectionCriteria::new(prefixes, transfer::parse_not_before(&from_date)?);
    let stager = Stager::new(&config.staging_root);

    let session = transfer::open(&params, &config.timeouts())?;
    let result = transfer::download(session, &directory, &criteria)?;

    if config.stage_downloads {
        stager.stage(&destination, &result)?;
    }
    let bytes = archive::pack(&result)?;
    let path = stager.write_archive(&destination, output.as_deref(), &bytes)?;
    util::show_download_table(&result);
    util::print_ok(&format!(
        "{} files ({}) archived to {}",
        result.len(),
        util::human_bytes(result.total_bytes()),
        path.display()
    ));
    Ok(path)
}

/// 上传：收集本地条目，逐个确保目录并写入
pub fn handle_upload(config: &Config, args: UploadArgs) -> Result<Vec<String>> {
    let UploadArgs { conn, remote_dir, extract_zip, sources } = args;
    let params = connection_params(&conn)?;
    let items = intake::collect_items(&sources, extract_zip)?;

    let session = transfer::open(&params, &config.timeouts())?;
    let result = transfer::upload(session, &remote_dir, items)?;

    // machine-readable on stdout, same shape as the upload summary elsewhere
    println!("{}", serde_json::to_string(&result)?);
    Ok(result.uploaded)
}

pub fn read_mail_request(path: &Path) -> Result<mail::SendMailRequest> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read mail request {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("invalid mail request {}", path.display()))
}

pub fn handle_send_mail(config: &Config, request: &Path) -> Result<()> {
    let req = read_mail_request(request)?;
    mail::send(&req, config.timeouts().io)?;
    util::print_ok(&format!("mail sent to {}", req.mail.recipient));
    Ok(())
}
