use std::time::Duration;

use futures::{Sink, Stream};
use tokio::net::TcpStream;
use tokio_serial::{SerialPortBuilder, SerialPortBuilderExt, SerialStream};
use tokio_util::codec::Framed;
use url::Url;
use anyhow::{Result, Context, bail};

use crate::protocol::codec::{PioneerCodec, TxFrame};
use crate::protocol::decoder::RxFrame;
use crate::transport::{SerialTransport, TcpTransport, Transport};


/// The unit's UART runs at 9600 baud, 8 data bits, even parity, 1 stop bit.
pub const BAUD_RATE: u32 = 9600;

fn serial_builder(path: &str) -> SerialPortBuilder {
    tokio_serial::new(path, BAUD_RATE)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::Even)
        .stop_bits(tokio_serial::StopBits::One)
        .timeout(Duration::from_millis(10))
}

fn tcp_address(url: &Url) -> Result<(String, u16)> {
    let host = url.host_str()
        .with_context(|| format!("tcp+raw requires a host to be specified in the url: {url}"))?;

    let port = url.port()
        .with_context(|| format!("tcp+raw requires a port number to be specified in the url: {url}"))?;

    Ok((host.to_string(), port))
}


pub enum Port {
    Serial(SerialStream),
    TcpRaw(TcpStream)
}


pub trait PortStream: Stream<Item = std::io::Result<RxFrame>> + Sink<TxFrame, Error = std::io::Error> + Send + Unpin {}

impl<T> PortStream for T
where
    T: Stream<Item = std::io::Result<RxFrame>> + Sink<TxFrame, Error = std::io::Error> + Send + Unpin,
{}


impl Port {
    /// Open a port from a `serial:///dev/path` or `tcp+raw://host:port` url.
    pub async fn open(url: &Url) -> Result<Self> {
        match url.scheme() {
            "serial" => {
                let path = url.path();

                let port = serial_builder(path)
                    .open_native_async()
                    .with_context(|| format!("failed to open serial port {path}"))
                    ?;

                Ok(Self::Serial(port))
            },
            "tcp+raw" => {
                let (host, port) = tcp_address(url)?;

                let stream = TcpStream::connect((host.as_str(), port)).await
                    .with_context(|| format!("failed to open tcp+raw connection to: {url}"))?;

                stream.set_nodelay(true)?;

                Ok(Self::TcpRaw(stream))
            },
            other => {
                bail!("url scheme {other} not supported");
            }
        }
    }

    pub fn framed(self, status_body_len: usize) -> Box<dyn PortStream> {
        let codec = PioneerCodec::with_status_body_len(status_body_len);

        match self {
            Port::Serial(port) => {
                Box::new(Framed::new(port, codec))
            },
            Port::TcpRaw(stream) => {
                Box::new(Framed::new(stream, codec))
            }
        }
    }
}


/// Open a non-blocking [Transport] for the controller from the same urls as [Port::open].
pub fn open_transport(url: &Url) -> Result<Box<dyn Transport>> {
    match url.scheme() {
        "serial" => {
            let path = url.path();

            let port = serial_builder(path)
                .open()
                .with_context(|| format!("failed to open serial port {path}"))?;

            Ok(Box::new(SerialTransport::new(port)))
        },
        "tcp+raw" => {
            let (host, port) = tcp_address(url)?;

            let stream = std::net::TcpStream::connect((host.as_str(), port))
                .with_context(|| format!("failed to open tcp+raw connection to: {url}"))?;

            Ok(Box::new(TcpTransport::new(stream)?))
        },
        other => {
            bail!("url scheme {other} not supported");
        }
    }
}
