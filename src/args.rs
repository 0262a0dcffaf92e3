use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Whether clients connect over https.
    /// If so, the authToken cookie is sent as a secure cookie.
    #[arg(short, long)]
    secure: bool,

    /// The address to listen on. By default
    /// the board listens just on the IPv4 loopback.
    #[arg(short, long)]
    address: Option<String>,

    /// The port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Directory holding the database, created on first start.
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// Static files, served under /public.
    #[arg(long, default_value = "./public")]
    public_dir: PathBuf,

    /// Seconds a login stays valid.
    #[arg(long, default_value_t = 30 * 24 * 60 * 60, value_parser = clap::value_parser!(u64).range(1..))]
    session_lifetime: u64,
}

impl Args {
    pub fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.address
            .as_deref()
            .unwrap_or("127.0.0.1")
            .parse()
            .map(|addr: IpAddr| (addr, self.port).into())
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn session_lifetime(&self) -> u64 {
        self.session_lifetime
    }
}
