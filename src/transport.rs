use std::io::{self, Read, Write};
use std::net::TcpStream;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_serial::SerialPort;


/// Byte link to the unit. Knows nothing about frames.
///
/// Neither call may block: `read_available` returns whatever has already
/// been received, possibly nothing.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn read_available(&mut self) -> io::Result<Bytes>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn read_available(&mut self) -> io::Result<Bytes> {
        (**self).read_available()
    }
}


pub struct SerialTransport {
    port: Box<dyn SerialPort>
}

impl SerialTransport {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_available(&mut self) -> io::Result<Bytes> {
        let available = self.port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = vec![0; available];
        let n = self.port.read(&mut buf)?;
        buf.truncate(n);

        Ok(buf.into())
    }
}


/// Raw TCP link, e.g. to a serial-to-network bridge.
///
/// Writes the socket can't take yet are queued and sent on the next call.
pub struct TcpTransport {
    stream: TcpStream,
    unsent: BytesMut
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;

        Ok(Self { stream, unsent: BytesMut::new() })
    }

    /// Bytes accepted by `write` that haven't reached the socket yet.
    pub fn unsent(&self) -> usize {
        self.unsent.len()
    }

    /// Send as much of the queue as the socket takes without blocking.
    pub fn flush_unsent(&mut self) -> io::Result<()> {
        while !self.unsent.is_empty() {
            match self.stream.write(&self.unsent) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.unsent.advance(n),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

impl Transport for TcpTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.unsent.put_slice(bytes);
        self.flush_unsent()
    }

    fn read_available(&mut self) -> io::Result<Bytes> {
        self.flush_unsent()?;

        let mut received = BytesMut::new();
        let mut buf = [0; 256];

        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    if received.is_empty() {
                        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"));
                    }
                    break;
                },
                Ok(n) => received.put_slice(&buf[..n]),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        Ok(received.freeze())
    }
}


#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn test_tcp_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");

        let mut transport = TcpTransport::new(TcpStream::connect(addr).expect("connect")).expect("transport");
        let (mut peer, _) = listener.accept().expect("accept");

        assert!(transport.read_available().expect("read").is_empty());

        peer.write_all(&[0xbb, 0x00, 0x01]).expect("peer write");
        peer.flush().expect("flush");

        let mut received = BytesMut::new();
        for _ in 0..100 {
            received.put(transport.read_available().expect("read"));
            if received.len() == 3 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(&received[..], &[0xbb, 0x00, 0x01]);

        transport.write(&[0x03, 0x04]).expect("write");
        let mut buf = [0; 2];
        peer.read_exact(&mut buf).expect("peer read");
        assert_eq!(buf, [0x03, 0x04]);
    }

    #[test]
    fn test_tcp_write_queues_when_socket_full() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");

        let mut transport = TcpTransport::new(TcpStream::connect(addr).expect("connect")).expect("transport");
        let (mut peer, _) = listener.accept().expect("accept");

        // more than the socket buffers hold while nobody reads
        let sent: Vec<u8> = (0..8 * 1024 * 1024).map(|n| n as u8).collect();
        transport.write(&sent).expect("write returns without blocking");

        let expected = sent.clone();
        let reader = std::thread::spawn(move || {
            let mut received = vec![0; expected.len()];
            peer.read_exact(&mut received).expect("peer read");
            received == expected
        });

        while transport.unsent() > 0 {
            transport.flush_unsent().expect("flush");
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        assert!(reader.join().expect("reader"));
    }
}
