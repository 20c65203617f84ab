//! Binary message format for querying mazes over a persistent connection.
//!
//! Every message starts with a one-byte opcode (requests) or type (responses).
//! Multi-byte integers are big-endian and colours are three bytes of RGB.

use image::Rgb;
use thiserror::Error;

use crate::source::MazeRequest;
use crate::trace::StepFlags;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,

    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    /// The message ended before field `field` could be read.
    #[error("message truncated while reading {field}")]
    Truncated { field: &'static str },

    #[error("invalid step tag {0:#04x}")]
    InvalidTag(u8),

    #[error("error message is not valid utf-8")]
    InvalidMessage,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    /// Build a maze and register it.
    NewMaze(MazeRequest),
    /// Ids of every registered maze.
    ListMazes,
    /// Stream the walls of a maze.
    GetMaze { id: u32 },
    /// Solve a maze and stream its traces.
    SolveMaze { id: u32 },
}

/// A pixel position, already multiplied by the maze's ratio.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WirePoint {
    pub x: u16,
    pub y: u16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WireTrace {
    pub point: WirePoint,
    /// On the final route exactly when [`crate::StepFlags::OK`] is set.
    pub tag: StepFlags,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// Ids in ascending order.
    MazeList(Vec<u32>),
    Maze {
        id: u32,
        ratio: u16,
        /// Height of the rendered maze in pixels.
        height: u16,
        /// Width of the rendered maze in pixels.
        width: u16,
        wall: Rgb<u8>,
        path: Rgb<u8>,
        walls: Vec<WirePoint>,
    },
    Solution {
        id: u32,
        ratio: u16,
        traces: Vec<WireTrace>,
    },
    Error(String),
}

mod opcode {
    pub const NEW_MAZE: u8 = 1;
    pub const LIST_MAZES: u8 = 2;
    pub const GET_MAZE: u8 = 3;
    pub const SOLVE_MAZE: u8 = 4;

    pub const MAZE_LIST: u8 = 1;
    pub const MAZE: u8 = 2;
    pub const SOLUTION: u8 = 3;
    pub const ERROR: u8 = 255;
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], ProtocolError> {
        if self.buf.len() < n {
            return Err(ProtocolError::Truncated { field });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, ProtocolError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, ProtocolError> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, ProtocolError> {
        let b = self.take(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn rgb(&mut self, field: &'static str) -> Result<Rgb<u8>, ProtocolError> {
        let b = self.take(3, field)?;
        Ok(Rgb([b[0], b[1], b[2]]))
    }

    fn point(&mut self) -> Result<WirePoint, ProtocolError> {
        Ok(WirePoint {
            x: self.u16("x")?,
            y: self.u16("y")?,
        })
    }

    /// Reads the opcode, treating an empty buffer as an empty message.
    fn opcode(&mut self) -> Result<u8, ProtocolError> {
        self.u8("opcode").map_err(|_| ProtocolError::Empty)
    }
}

impl Request {
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = Reader { buf };
        match r.opcode()? {
            opcode::NEW_MAZE => Ok(Request::NewMaze(MazeRequest {
                height: r.u16("height")?,
                width: r.u16("width")?,
                ratio: r.u16("ratio")?,
                wall: r.rgb("wall colour")?,
                path: r.rgb("path colour")?,
            })),
            opcode::LIST_MAZES => Ok(Request::ListMazes),
            opcode::GET_MAZE => Ok(Request::GetMaze { id: r.u32("id")? }),
            opcode::SOLVE_MAZE => Ok(Request::SolveMaze { id: r.u32("id")? }),
            op => Err(ProtocolError::UnknownOpcode(op)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Request::NewMaze(req) => {
                buf.push(opcode::NEW_MAZE);
                buf.extend_from_slice(&req.height.to_be_bytes());
                buf.extend_from_slice(&req.width.to_be_bytes());
                buf.extend_from_slice(&req.ratio.to_be_bytes());
                buf.extend_from_slice(&req.wall.0);
                buf.extend_from_slice(&req.path.0);
            }
            Request::ListMazes => buf.push(opcode::LIST_MAZES),
            Request::GetMaze { id } => {
                buf.push(opcode::GET_MAZE);
                buf.extend_from_slice(&id.to_be_bytes());
            }
            Request::SolveMaze { id } => {
                buf.push(opcode::SOLVE_MAZE);
                buf.extend_from_slice(&id.to_be_bytes());
            }
        }
        buf
    }
}

impl Response {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Response::MazeList(ids) => {
                // the count field is 16 bits, later ids are left out
                let count = u16::try_from(ids.len()).unwrap_or(u16::MAX);
                buf.push(opcode::MAZE_LIST);
                buf.extend_from_slice(&count.to_be_bytes());
                for id in ids.iter().take(count.into()) {
                    buf.extend_from_slice(&id.to_be_bytes());
                }
            }
            Response::Maze {
                id,
                ratio,
                height,
                width,
                wall,
                path,
                walls,
            } => {
                buf.push(opcode::MAZE);
                buf.extend_from_slice(&id.to_be_bytes());
                buf.extend_from_slice(&ratio.to_be_bytes());
                buf.extend_from_slice(&height.to_be_bytes());
                buf.extend_from_slice(&width.to_be_bytes());
                buf.extend_from_slice(&wall.0);
                buf.extend_from_slice(&path.0);
                for p in walls {
                    buf.extend_from_slice(&p.x.to_be_bytes());
                    buf.extend_from_slice(&p.y.to_be_bytes());
                }
            }
            Response::Solution { id, ratio, traces } => {
                buf.push(opcode::SOLUTION);
                buf.extend_from_slice(&id.to_be_bytes());
                buf.extend_from_slice(&ratio.to_be_bytes());
                for t in traces {
                    buf.extend_from_slice(&t.point.x.to_be_bytes());
                    buf.extend_from_slice(&t.point.y.to_be_bytes());
                    buf.push(t.tag.bits());
                }
            }
            Response::Error(message) => {
                // longer messages are cut on a char boundary to fit the length field
                let mut end = message.len().min(u16::MAX as usize);
                while !message.is_char_boundary(end) {
                    end -= 1;
                }
                buf.push(opcode::ERROR);
                buf.extend_from_slice(&(end as u16).to_be_bytes());
                buf.extend_from_slice(&message.as_bytes()[..end]);
            }
        }
        buf
    }

    /// Decodes a response. Wall and trace lists run to the end of the message.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = Reader { buf };
        match r.opcode()? {
            opcode::MAZE_LIST => {
                let count = r.u16("count")?;
                let ids = (0..count)
                    .map(|_| r.u32("id"))
                    .collect::<Result<_, _>>()?;
                Ok(Response::MazeList(ids))
            }
            opcode::MAZE => {
                let id = r.u32("id")?;
                let ratio = r.u16("ratio")?;
                let height = r.u16("height")?;
                let width = r.u16("width")?;
                let wall = r.rgb("wall colour")?;
                let path = r.rgb("path colour")?;
                let mut walls = Vec::with_capacity(r.buf.len() / 4);
                while !r.buf.is_empty() {
                    walls.push(r.point()?);
                }
                Ok(Response::Maze {
                    id,
                    ratio,
                    height,
                    width,
                    wall,
                    path,
                    walls,
                })
            }
            opcode::SOLUTION => {
                let id = r.u32("id")?;
                let ratio = r.u16("ratio")?;
                let mut traces = Vec::with_capacity(r.buf.len() / 5);
                while !r.buf.is_empty() {
                    let point = r.point()?;
                    let bits = r.u8("tag")?;
                    let tag = StepFlags::from_bits(bits).ok_or(ProtocolError::InvalidTag(bits))?;
                    traces.push(WireTrace { point, tag });
                }
                Ok(Response::Solution { id, ratio, traces })
            }
            opcode::ERROR => {
                let len = r.u16("message length")?;
                let bytes = r.take(len.into(), "message")?;
                let message =
                    std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidMessage)?;
                Ok(Response::Error(message.to_owned()))
            }
            op => Err(ProtocolError::UnknownOpcode(op)),
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_decode_new_maze() {
        let buf = [1, 0, 10, 0, 20, 0, 4, 0, 0, 0, 255, 255, 255];
        assert_eq!(
            Request::decode(&buf),
            Ok(Request::NewMaze(MazeRequest {
                height: 10,
                width: 20,
                ratio: 4,
                wall: Rgb([0, 0, 0]),
                path: Rgb([255, 255, 255]),
            }))
        );
        assert_eq!(Request::decode(&buf).unwrap().encode(), buf);
    }

    #[test]
    fn test_decode_requests() {
        assert_eq!(Request::decode(&[2]), Ok(Request::ListMazes));
        assert_eq!(
            Request::decode(&[3, 0, 0, 1, 2]),
            Ok(Request::GetMaze { id: 258 })
        );
        assert_eq!(
            Request::decode(&[4, 0x65, 0, 0, 0]),
            Ok(Request::SolveMaze { id: 0x6500_0000 })
        );
    }

    #[test]
    fn test_decode_bad_requests() {
        assert_eq!(Request::decode(&[]), Err(ProtocolError::Empty));
        assert_eq!(Request::decode(&[9]), Err(ProtocolError::UnknownOpcode(9)));
        assert_eq!(
            Request::decode(&[3, 0, 0]),
            Err(ProtocolError::Truncated { field: "id" })
        );
        assert_eq!(
            Request::decode(&[1, 0, 10, 0, 20, 0, 4, 0, 0, 0, 255]),
            Err(ProtocolError::Truncated {
                field: "path colour"
            })
        );
    }

    #[test]
    fn test_encode_maze_list() {
        let buf = Response::MazeList(vec![1, 0x0102_0304]).encode();
        assert_eq!(buf, vec![1, 0, 2, 0, 0, 0, 1, 1, 2, 3, 4]);
    }

    #[test]
    fn test_maze_list_count_is_capped() {
        let ids: Vec<u32> = (0..70_000).collect();
        let buf = Response::MazeList(ids).encode();
        assert_eq!(&buf[..3], &[1, 0xff, 0xff]);
        assert_eq!(buf.len(), 3 + 4 * usize::from(u16::MAX));

        let Response::MazeList(decoded) = Response::decode(&buf).unwrap() else {
            panic!("expected a maze list");
        };
        assert_eq!(decoded.len(), usize::from(u16::MAX));
        assert_eq!(decoded.last(), Some(&65_534));
    }

    #[test]
    fn test_encode_solution() {
        let response = Response::Solution {
            id: 7,
            ratio: 2,
            traces: vec![
                WireTrace {
                    point: WirePoint { x: 2, y: 4 },
                    tag: StepFlags::OK | StepFlags::VISITED,
                },
                WireTrace {
                    point: WirePoint { x: 300, y: 6 },
                    tag: StepFlags::VISITED,
                },
            ],
        };
        let buf = response.encode();
        assert_eq!(
            buf,
            vec![3, 0, 0, 0, 7, 0, 2, 0, 2, 0, 4, 6, 1, 44, 0, 6, 4]
        );
        assert_eq!(Response::decode(&buf), Ok(response));
    }

    #[test]
    fn test_decode_truncated_walls() {
        let mut buf = Response::Maze {
            id: 1,
            ratio: 1,
            height: 5,
            width: 5,
            wall: Rgb([0, 0, 0]),
            path: Rgb([255, 255, 255]),
            walls: vec![WirePoint { x: 1, y: 1 }],
        }
        .encode();
        buf.pop();
        assert_eq!(
            Response::decode(&buf),
            Err(ProtocolError::Truncated { field: "y" })
        );
    }

    #[test]
    fn test_error_response() {
        let buf = Response::Error("no maze 4".into()).encode();
        assert_eq!(&buf[..3], &[255, 0, 9]);
        assert_eq!(Response::decode(&buf), Ok(Response::Error("no maze 4".into())));

        assert_eq!(
            Response::decode(&[255, 0, 1, 0xff]),
            Err(ProtocolError::InvalidMessage)
        );
    }
}
