//! Blocking TCP client
//!
//! One request in flight at a time over a single connection.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{Result, SiltError};
use crate::protocol::{read_response, write_command, Command, Response, Status};

/// Client for a SiltKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a raw command and wait for its response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// `None` when the key does not exist
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let response = self.send(&Command::Get { key: key.to_vec() })?;
        match response.status {
            Status::Ok => Ok(Some(response.payload.unwrap_or_default())),
            Status::NotFound => Ok(None),
            _ => Err(into_error(response)),
        }
    }

    /// Store a value; returns the value echoed by the server
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<Vec<u8>> {
        let response = self.send(&Command::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        match response.status {
            Status::Ok => Ok(response.payload.unwrap_or_default()),
            _ => Err(into_error(response)),
        }
    }

    /// `false` when the key did not exist
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        let response = self.send(&Command::Delete { key: key.to_vec() })?;
        match response.status {
            Status::Ok => Ok(true),
            Status::NotFound => Ok(false),
            _ => Err(into_error(response)),
        }
    }

    pub fn ping(&mut self) -> Result<()> {
        let response = self.send(&Command::Ping)?;
        match response.status {
            Status::Ok => Ok(()),
            _ => Err(into_error(response)),
        }
    }
}

fn into_error(response: Response) -> SiltError {
    let message = String::from_utf8_lossy(response.body()).into_owned();
    match response.status {
        Status::Invalid => SiltError::InvalidRequest(message),
        Status::Error => SiltError::Server(message),
        status => SiltError::Protocol(format!("unexpected status {:?}", status)),
    }
}
