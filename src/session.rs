use std::net::Ipv4Addr;

/// Estado compartilhado de uma sessão de ping: correlação de replies e
/// contadores agregados. O emissor e o receptor escrevem aqui por trás
/// de um `Mutex`; o handler de Ctrl+C só lê.
pub struct Session {
    ident: u16,
    next_seq: u16,
    sent: u64,
    received: u64,
    min_rtt: f64,
    max_rtt: f64,
    sum_rtt: f64,
}

impl Session {
    pub fn new(ident: u16) -> Self {
        Session {
            ident,
            next_seq: 0,
            sent: 0,
            received: 0,
            // Sentinela maior que qualquer RTT real
            min_rtt: f64::INFINITY,
            max_rtt: 0.0,
            sum_rtt: 0.0,
        }
    }

    pub fn ident(&self) -> u16 {
        self.ident
    }

    /// Registra um envio: devolve a sequência a usar e avança os
    /// contadores. A sequência dá a volta em 16 bits; uma sequência
    /// reutilizada conta como uma sonda nova em trânsito.
    pub fn register_send(&mut self) -> u16 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.sent += 1;
        seq
    }

    /// Registra um Echo Reply válido com o RTT medido em milissegundos.
    pub fn register_reply(&mut self, rtt_ms: f64) {
        self.received += 1;
        self.sum_rtt += rtt_ms;
        self.min_rtt = self.min_rtt.min(rtt_ms);
        self.max_rtt = self.max_rtt.max(rtt_ms);
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Perda em porcentagem. Sem nenhum envio a perda é total.
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 100.0;
        }
        (1.0 - self.received as f64 / self.sent as f64) * 100.0
    }

    pub fn min_rtt(&self) -> Option<f64> {
        (self.received > 0).then_some(self.min_rtt)
    }

    pub fn max_rtt(&self) -> Option<f64> {
        (self.received > 0).then_some(self.max_rtt)
    }

    pub fn avg_rtt(&self) -> Option<f64> {
        (self.received > 0).then_some(self.sum_rtt / self.received as f64)
    }
}

/// Imprime o resumo final no formato do ping clássico. Sem nenhum reply
/// a linha de rtt é omitida.
pub fn print_summary(session: &Session, dst: Ipv4Addr) {
    println!();
    println!("--- estatísticas de ping para {} ---", dst);
    println!(
        "{} pacotes transmitidos, {} recebidos, {:.1}% de perda de pacotes",
        session.sent(),
        session.received(),
        session.loss_percent()
    );
    if let (Some(min), Some(avg), Some(max)) =
        (session.min_rtt(), session.avg_rtt(), session.max_rtt())
    {
        println!("rtt min/avg/max = {:.3}/{:.3}/{:.3} ms", min, avg, max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn sequences_start_at_zero_and_increment() {
        let mut s = Session::new(77);
        assert_eq!(s.register_send(), 0);
        assert_eq!(s.register_send(), 1);
        assert_eq!(s.register_send(), 2);
        assert_eq!(s.sent(), 3);
    }

    #[test]
    fn sequence_wraps_at_u16() {
        let mut s = Session::new(77);
        for _ in 0..=u16::MAX as u32 {
            s.register_send();
        }
        // 65536 envios consumiram 0..=65535; o próximo volta ao zero
        assert_eq!(s.register_send(), 0);
        assert_eq!(s.sent(), 65537);
    }

    #[test]
    fn three_sent_two_received() {
        let mut s = Session::new(1);
        s.register_send();
        s.register_send();
        s.register_send();
        s.register_reply(10.0);
        s.register_reply(30.0);

        assert_eq!(s.sent(), 3);
        assert_eq!(s.received(), 2);
        assert!((s.loss_percent() - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.min_rtt(), Some(10.0));
        assert_eq!(s.avg_rtt(), Some(20.0));
        assert_eq!(s.max_rtt(), Some(30.0));
    }

    #[test]
    fn no_sends_reports_total_loss_without_dividing() {
        let s = Session::new(1);
        assert_eq!(s.loss_percent(), 100.0);
        assert_eq!(s.avg_rtt(), None);
    }

    #[test]
    fn no_replies_leaves_rtt_undefined() {
        let mut s = Session::new(1);
        s.register_send();
        assert_eq!(s.loss_percent(), 100.0);
        assert_eq!(s.min_rtt(), None);
        assert_eq!(s.avg_rtt(), None);
        assert_eq!(s.max_rtt(), None);
    }

    #[test]
    fn concurrent_sends_and_replies_keep_exact_counts() {
        let session = Arc::new(Mutex::new(Session::new(9)));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let session = session.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    session.lock().unwrap().register_send();
                }
            }));
        }
        for _ in 0..4 {
            let session = session.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    session.lock().unwrap().register_reply(5.0);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let s = session.lock().unwrap();
        assert_eq!(s.sent(), 1000);
        assert_eq!(s.received(), 1000);
        assert_eq!(s.min_rtt(), Some(5.0));
        assert_eq!(s.max_rtt(), Some(5.0));
        assert_eq!(s.avg_rtt(), Some(5.0));
    }
}
