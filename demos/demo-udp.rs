use std::error::Error;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::thread;
use std::time::Duration;
use udppunch::udp::{Client, Server};

fn main() -> Result<(), Box<dyn Error>> {
    let server_addr = "127.0.0.1:8888";

    {
        thread::spawn(move || Server::new(server_addr).unwrap().run().unwrap());
    }

    let t = thread::spawn(move || {
        let mut c = Client::new(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
        // loopback threads are not as synchronized as two served clients
        c.set_punch_timeout(Duration::from_millis(100));
        let id = c.connect(server_addr).unwrap();

        let mut buf = [0u8; 5];
        if id == 1 {
            c.send(b"hello").unwrap();
            c.recv(&mut buf).unwrap();
        } else {
            c.recv(&mut buf).unwrap();
            c.send(&buf).unwrap();
        }
        println!("peer {} at {} sent {:?}", id, c.peer_addr().unwrap(), buf);
    });

    let mut c = Client::new(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
    c.set_punch_timeout(Duration::from_millis(100));
    let id = c.connect(server_addr).unwrap();

    let mut buf = [0u8; 5];
    if id == 1 {
        c.send(b"hello").unwrap();
        c.recv(&mut buf).unwrap();
    } else {
        c.recv(&mut buf).unwrap();
        c.send(&buf).unwrap();
    }
    println!("peer {} at {} sent {:?}", id, c.peer_addr().unwrap(), buf);

    t.join().unwrap();

    Ok(())
}
