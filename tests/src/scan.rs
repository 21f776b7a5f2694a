mod host;
mod idle;
mod ports;
mod requests;
