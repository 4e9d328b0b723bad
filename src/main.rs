// Tratamento de erros ergonômico
use anyhow::{Context, Result};

// Criação e configuração de sockets de baixo nível
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use log::debug;
use std::io::ErrorKind;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Módulos locais
mod args;
mod icmp;
mod session;

use session::Session;

/// Intervalo fixo entre Echo Requests.
const SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Programa principal: dispara Echo Requests a cada segundo numa thread
/// emissora enquanto a thread principal recebe e correlaciona os Echo
/// Replies. Ctrl+C imprime as estatísticas e encerra.
/// Requer privilégios para abrir o socket RAW (root ou CAP_NET_RAW).
fn main() -> Result<()> {
    env_logger::init();

    // Destino via módulo args (literal IPv4 ou nome resolvido)
    let args = args::parse()?;
    let dst = args.dst;

    // Cria um socket ICMP RAW
    // Domain::IPV4 -> AF_INET
    // Type::RAW -> SOCK_RAW
    // Protocol::ICMPV4 -> IPPROTO_ICMP
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
        .context("Falha ao criar socket RAW. Verifique se está rodando como root.")?;
    let socket = Arc::new(socket);

    // Identificador: usa o PID do processo (comum em pings)
    let session = Arc::new(Mutex::new(Session::new(std::process::id() as u16)));
    let ident = session.lock().unwrap().ident();

    // Handler de Ctrl+C: imprime as estatísticas e encerra com sucesso.
    // Roda em thread própria, então dispara mesmo com o recv bloqueado.
    {
        let session = session.clone();
        ctrlc::set_handler(move || {
            session::print_summary(&session.lock().unwrap(), dst);
            std::process::exit(0);
        })
        .context("Erro ao configurar handler de Ctrl+C")?;
    }

    println!("Disparando {} com {} bytes de dados:", dst, icmp::PAYLOAD_LEN);

    // Emissor: um Echo Request por segundo, começando imediatamente
    {
        let socket = socket.clone();
        let session = session.clone();
        let dst_sa: SockAddr = SocketAddr::new(IpAddr::V4(dst), 0).into();
        thread::spawn(move || {
            loop {
                let seq = session.lock().unwrap().register_send();
                let pkt = icmp::build_echo_request(ident, seq, unix_micros());

                // Falha de envio não derruba o emissor; o próximo tick segue
                if let Err(e) = socket.send_to(&pkt, &dst_sa) {
                    debug!("falha ao enviar icmp_seq={}: {}", seq, e);
                }

                thread::sleep(SEND_INTERVAL);
            }
        });
    }

    receive_loop(&socket, &session, ident, dst)
}

/// Loop de recepção: bloqueia no socket, decodifica cada datagrama e
/// alimenta a sessão com os replies correlacionados.
fn receive_loop(
    socket: &Socket,
    session: &Mutex<Session>,
    ident: u16,
    dst: Ipv4Addr,
) -> Result<()> {
    // Buffer de recepção (MTU típica)
    let mut buf = [MaybeUninit::<u8>::uninit(); 1500];

    loop {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            // Leitura interrompida por sinal: tenta de novo
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Erro fatal na leitura do socket"),
        };
        let arrival_micros = unix_micros();

        // O kernel inicializou os primeiros `len` bytes
        let datagram = unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const u8, len) };
        let src = from.as_socket_ipv4().map(|sa| *sa.ip()).unwrap_or(dst);

        match icmp::parse_echo_reply(datagram, ident) {
            Ok(reply) => {
                let rtt_ms = arrival_micros.saturating_sub(reply.sent_micros) as f64 / 1000.0;
                session.lock().unwrap().register_reply(rtt_ms);
                println!(
                    "Resposta de {}: bytes={} icmp_seq={} tempo={:.3}ms",
                    src, reply.len, reply.seq, rtt_ms
                );
            }
            Err(icmp::Discard::TooShort { len }) => {
                println!("Pacote muito curto ({} bytes) de {}", len, src);
            }
            // Tráfego alheio é esperado num socket RAW compartilhado
            Err(reason) => debug!("datagrama de {} descartado: {}", src, reason),
        }
    }
}

/// Relógio de parede em microssegundos desde a época Unix.
fn unix_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
