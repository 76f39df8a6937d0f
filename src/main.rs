use rand::RngCore;
use std::net::{SocketAddr, SocketAddrV4};
use std::process::exit;
use structopt::StructOpt;

use udppunch::udp::{Client, Server};
use udppunch::Result;

#[derive(StructOpt, Debug)]
#[structopt(name = "udppunch")]
enum Opt {
    /// Punch a path to whoever the rendezvous server pairs us with.
    Client(ClientOpt),
    /// Pair two clients and tell each the other's address.
    Server(ServerOpt),
}

#[derive(StructOpt, Debug)]
struct ClientOpt {
    /// Fixed local bind address; registration and punching must leave the
    /// same NAT mapping behind.
    #[structopt(long = "local-addr")]
    local_addr: SocketAddrV4,

    #[structopt(long = "server-addr")]
    server_addr: SocketAddrV4,

    /// Ping-pong rounds after the handshake.
    #[structopt(long = "rounds", default_value = "10")]
    rounds: usize,

    /// Payload bytes per datagram, must stay under 508.
    #[structopt(long = "size", default_value = "100")]
    size: usize,
}

#[derive(StructOpt, Debug)]
struct ServerOpt {
    #[structopt(long = "listen-addr", default_value = "0.0.0.0:8888")]
    listen_addr: SocketAddr,
}

fn main() {
    env_logger::init();

    let opt: Opt = StructOpt::from_args();
    let result = match opt {
        Opt::Server(opt) => run_server(opt),
        Opt::Client(opt) => run_client(opt),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        exit(1);
    }
}

fn run_server(opt: ServerOpt) -> Result<()> {
    Server::new(opt.listen_addr)?.run()
}

fn run_client(opt: ClientOpt) -> Result<()> {
    let mut client = Client::new(opt.local_addr)?;
    let pairing_id = client.connect(opt.server_addr)?;

    let mut buf = vec![0u8; opt.size];
    for round in 0..opt.rounds {
        if pairing_id == 1 {
            rand::thread_rng().fill_bytes(&mut buf);
            client.send(&buf)?;
            client.recv(&mut buf)?;
        } else {
            client.recv(&mut buf)?;
            client.send(&buf)?;
        }
        log::debug!("round {} done", round);
    }

    Ok(())
}
