use std::fmt::Display;

pub type MachineId = usize;

/// One reconstruction attempt of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId {
    pub client: MachineId,
    pub nonce: u32,
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.client, self.nonce)
    }
}

/// Fragment of `owner`'s file kept by `keeper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePacket {
    pub owner: MachineId,
    pub keeper: MachineId,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPacket {
    /// Machine whose fragment is wanted.
    pub requester: MachineId,
    pub session: SessionId,
}

/// Fragment on its way from a server to its OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerInfo {
    pub packet: CodePacket,
    pub session: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Request,
    Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpFrame {
    pub session: SessionId,
    pub src: MachineId,
    pub dst: MachineId,
    pub len: usize,
    pub kind: FrameKind,
    /// Frames making up the whole packet this one belongs to.
    pub count: usize,
}

impl UdpFrame {
    pub fn request(session: SessionId, src: MachineId, dst: MachineId, len: usize) -> Self {
        Self {
            session,
            src,
            dst,
            len,
            kind: FrameKind::Request,
            count: 1,
        }
    }
}

impl Display for UdpFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}[{} {}->{} {}B, {} frames]",
            self.kind, self.session, self.src, self.dst, self.len, self.count
        )
    }
}
