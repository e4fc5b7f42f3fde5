use futures_util::{SinkExt, StreamExt};
use relay_protocol::{ClientFrame, EnvelopeDelivery, ServerFrame};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::MaybeTlsStream;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A frame arriving on the socket after registration is either a protocol
/// control frame (`registered`, `peer_list`, `error`, ...) or a delivered
/// envelope -- both are plain JSON objects, so decoding tries `ServerFrame`
/// first and falls back to `EnvelopeDelivery`.
#[derive(Debug)]
pub enum Inbound {
    Server(ServerFrame),
    Envelope(EnvelopeDelivery),
}

pub struct MockWsClient {
    write: futures_util::stream::SplitSink<WsStream, Message>,
    read: futures_util::stream::SplitStream<WsStream>,
}

impl MockWsClient {
    pub async fn connect(url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (write, read) = ws_stream.split();
        Ok(Self { write, read })
    }

    pub async fn send_frame(
        &mut self,
        frame: &ClientFrame,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(frame)?;
        self.write.send(Message::Text(json.into())).await?;
        Ok(())
    }

    pub async fn register(
        &mut self,
        public_key: &str,
        name: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.send_frame(&ClientFrame::Register {
            public_key: public_key.to_owned(),
            name: name.map(str::to_owned),
            metadata: None,
        })
        .await
    }

    pub async fn recv(&mut self) -> Result<Inbound, Box<dyn std::error::Error>> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(frame) = serde_json::from_str::<ServerFrame>(&text) {
                        return Ok(Inbound::Server(frame));
                    }
                    let envelope: EnvelopeDelivery = serde_json::from_str(&text)?;
                    return Ok(Inbound::Envelope(envelope));
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) => return Err("connection closed by server".into()),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err("connection stream ended".into()),
            }
        }
    }

    pub async fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.write.send(Message::Close(None)).await?;
        Ok(())
    }
}
